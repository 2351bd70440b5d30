//! Live-editable colour parameters exposed to the debug panel.

use crate::color::{Color, ColorParseError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TunableParam {
    TextColor,
    PlaneColor,
    DirLightColor,
}

impl TunableParam {
    pub const ALL: &'static [TunableParam] = &[
        TunableParam::TextColor,
        TunableParam::PlaneColor,
        TunableParam::DirLightColor,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::TextColor => "Text colour",
            Self::PlaneColor => "Plane colour",
            Self::DirLightColor => "Light colour",
        }
    }
}

/// Current value of every tunable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tunables {
    pub text_color: Color,
    pub plane_color: Color,
    pub dir_light_color: Color,
}

impl Tunables {
    pub fn get(&self, param: TunableParam) -> Color {
        match param {
            TunableParam::TextColor => self.text_color,
            TunableParam::PlaneColor => self.plane_color,
            TunableParam::DirLightColor => self.dir_light_color,
        }
    }

    pub fn set(&mut self, param: TunableParam, color: Color) {
        match param {
            TunableParam::TextColor => self.text_color = color,
            TunableParam::PlaneColor => self.plane_color = color,
            TunableParam::DirLightColor => self.dir_light_color = color,
        }
    }

    /// Parse `value` and store it. The old value is kept on parse failure.
    pub fn set_str(&mut self, param: TunableParam, value: &str) -> Result<Color, ColorParseError> {
        let color: Color = value.parse()?;
        self.set(param, color);
        Ok(color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Tunables {
        Tunables {
            text_color: Color::WHITE,
            plane_color: Color::BLACK,
            dir_light_color: Color::WHITE,
        }
    }

    #[test]
    fn set_str_updates_only_named_param() {
        let mut t = sample();
        t.set_str(TunableParam::PlaneColor, "#102030").unwrap();
        assert_eq!(t.plane_color.to_hex(), "#102030");
        assert_eq!(t.text_color, Color::WHITE);
    }

    #[test]
    fn set_str_keeps_old_value_on_error() {
        let mut t = sample();
        assert!(t.set_str(TunableParam::TextColor, "not-a-colour").is_err());
        assert_eq!(t.get(TunableParam::TextColor), Color::WHITE);
    }

    #[test]
    fn labels_are_distinct() {
        let labels: std::collections::HashSet<_> =
            TunableParam::ALL.iter().map(|p| p.label()).collect();
        assert_eq!(labels.len(), TunableParam::ALL.len());
    }
}
