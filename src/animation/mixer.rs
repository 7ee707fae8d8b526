use std::collections::HashMap;

use crate::{
    animation::clip::{AnimationClip, Property, PropertyValue},
    scene_graph::{ObjectId, Scene},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopMode {
    /// Play to the end, hold the last pose and stop.
    Once,
    /// Wrap around to the start forever.
    Repeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActionId(usize);

pub struct AnimationAction {
    clip: AnimationClip,
    /// Scene object for each of the clip's channels.
    targets: Vec<Option<ObjectId>>,
    time: f32,
    playing: bool,

    pub weight: f32,
    pub time_scale: f32,
    pub loop_mode: LoopMode,
}

impl AnimationAction {
    pub fn play(&mut self) {
        self.playing = true;
    }

    #[cfg(test)]
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    #[cfg(test)]
    pub fn time(&self) -> f32 {
        self.time
    }

    fn advance(&mut self, delta: f32) {
        self.time += delta * self.time_scale;

        let duration = self.clip.duration;

        match self.loop_mode {
            LoopMode::Repeat if duration > 0.0 => {
                self.time = self.time.rem_euclid(duration);
            }
            LoopMode::Repeat => self.time = 0.0,
            LoopMode::Once => {
                if self.time >= duration {
                    self.time = duration;
                    self.playing = false;
                } else if self.time < 0.0 {
                    self.time = 0.0;
                    self.playing = false;
                }
            }
        }
    }
}

/// Plays animation clips on the scene objects their channels are bound to.
#[derive(Default)]
pub struct AnimationMixer {
    time: f32,
    actions: Vec<AnimationAction>,
}

impl AnimationMixer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total time this mixer has been advanced by.
    #[cfg(test)]
    pub fn time(&self) -> f32 {
        self.time
    }

    /// Creates a stopped action for `clip`, binding its channels through
    /// `node_objects` (asset node index to scene object).
    pub fn clip_action(
        &mut self,
        clip: AnimationClip,
        node_objects: &[Option<ObjectId>],
    ) -> ActionId {
        let targets = clip
            .channels
            .iter()
            .map(|channel| node_objects.get(channel.node).copied().flatten())
            .collect::<Vec<_>>();

        let unbound = targets.iter().filter(|target| target.is_none()).count();
        if unbound > 0 {
            log::warn!("{}: {unbound} channel(s) target unknown nodes", clip.name);
        }

        let id = ActionId(self.actions.len());

        self.actions.push(AnimationAction {
            clip,
            targets,
            time: 0.0,
            playing: false,
            weight: 1.0,
            time_scale: 1.0,
            loop_mode: LoopMode::Repeat,
        });

        id
    }

    #[cfg(test)]
    pub fn action(&self, id: ActionId) -> Option<&AnimationAction> {
        self.actions.get(id.0)
    }

    pub fn action_mut(&mut self, id: ActionId) -> Option<&mut AnimationAction> {
        self.actions.get_mut(id.0)
    }

    #[cfg(test)]
    pub fn actions(&self) -> impl Iterator<Item = &AnimationAction> {
        self.actions.iter()
    }

    /// Advances every playing action by `delta` seconds and writes the
    /// weighted blend of their poses to the bound objects.
    pub fn update(&mut self, delta: f32, scene: &mut Scene) {
        self.time += delta;

        let mut blended: HashMap<(ObjectId, Property), (PropertyValue, f32)> = HashMap::new();

        for action in self.actions.iter_mut().filter(|action| action.playing) {
            action.advance(delta);

            if action.weight <= 0.0 {
                continue;
            }

            for (channel, target) in action.clip.channels.iter().zip(&action.targets) {
                let (Some(target), Some(value)) = (target, channel.sample(action.time)) else {
                    continue;
                };

                blended
                    .entry((*target, value.property()))
                    .and_modify(|(accumulated, total_weight)| {
                        *total_weight += action.weight;
                        *accumulated = accumulated.blend(value, action.weight / *total_weight);
                    })
                    .or_insert((value, action.weight));
            }
        }

        for ((object_id, _), (value, _)) in blended {
            match value {
                PropertyValue::Translation(translation) => {
                    scene.set_object_translation(object_id, translation)
                }
                PropertyValue::Rotation(rotation) => scene.set_object_rotation(object_id, rotation),
                PropertyValue::Scale(scale) => scene.set_object_scale(object_id, scale),
            }
        }
    }
}
