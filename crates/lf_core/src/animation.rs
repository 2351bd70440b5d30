//! Clip playback state.
//!
//! The mixer tracks the playback clock and blend weight of every clip bundled
//! with a model; it does not pose bones or deform meshes. Clips always loop.

/// Name and length of one clip bundled with a model.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipInfo {
    pub name: String,
    /// Seconds. Zero-length clips are legal and never advance.
    pub duration: f32,
}

/// Index of an action inside its owning [`AnimationMixer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionId(usize);

#[derive(Debug, Clone, Copy)]
struct Fade {
    from: f32,
    to: f32,
    elapsed: f32,
    duration: f32,
}

#[derive(Debug, Clone)]
pub struct AnimationAction {
    pub clip: ClipInfo,
    pub time: f32,
    pub weight: f32,
    running: bool,
    fade: Option<Fade>,
}

impl AnimationAction {
    fn new(clip: ClipInfo) -> Self {
        Self {
            clip,
            time: 0.0,
            weight: 1.0,
            running: false,
            fade: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_fading(&self) -> bool {
        self.fade.is_some()
    }

    /// Rewind to the first frame and cancel any fade in progress.
    pub fn reset(&mut self) -> &mut Self {
        self.time = 0.0;
        self.fade = None;
        self
    }

    pub fn fade_in(&mut self, duration: f32) -> &mut Self {
        self.schedule_fade(0.0, 1.0, duration)
    }

    pub fn fade_out(&mut self, duration: f32) -> &mut Self {
        self.schedule_fade(1.0, 0.0, duration)
    }

    pub fn play(&mut self) -> &mut Self {
        self.running = true;
        self
    }

    pub fn stop(&mut self) -> &mut Self {
        self.running = false;
        self.fade = None;
        self
    }

    fn schedule_fade(&mut self, from: f32, to: f32, duration: f32) -> &mut Self {
        if duration <= 0.0 {
            self.weight = to;
            self.fade = None;
            if to == 0.0 {
                self.running = false;
            }
        } else {
            self.weight = from;
            self.fade = Some(Fade {
                from,
                to,
                elapsed: 0.0,
                duration,
            });
        }
        self
    }

    fn advance(&mut self, dt: f32) {
        if !self.running {
            return;
        }

        if self.clip.duration > 0.0 {
            self.time = (self.time + dt).rem_euclid(self.clip.duration);
        }

        if let Some(mut fade) = self.fade {
            fade.elapsed += dt;
            let t = (fade.elapsed / fade.duration).min(1.0);
            self.weight = fade.from + (fade.to - fade.from) * t;
            if t >= 1.0 {
                self.fade = None;
                // A finished fade-out disables the action entirely.
                if fade.to == 0.0 {
                    self.running = false;
                }
            } else {
                self.fade = Some(fade);
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnimationMixer {
    actions: Vec<AnimationAction>,
}

impl AnimationMixer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_clip(&mut self, clip: ClipInfo) -> ActionId {
        self.actions.push(AnimationAction::new(clip));
        ActionId(self.actions.len() - 1)
    }

    pub fn action(&self, id: ActionId) -> Option<&AnimationAction> {
        self.actions.get(id.0)
    }

    pub fn action_mut(&mut self, id: ActionId) -> Option<&mut AnimationAction> {
        self.actions.get_mut(id.0)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn running(&self) -> impl Iterator<Item = (ActionId, &AnimationAction)> {
        self.actions
            .iter()
            .enumerate()
            .filter(|(_, a)| a.running)
            .map(|(i, a)| (ActionId(i), a))
    }

    /// Advance every running action by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        for action in &mut self.actions {
            action.advance(dt);
        }
    }
}
