use glam::{Quat, Vec3};

use crate::model::Buffers;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interpolation {
    Step,
    Linear,
    /// Values are stored as `[in_tangent, value, out_tangent]` triplets.
    CubicSpline,
}

impl From<gltf::animation::Interpolation> for Interpolation {
    fn from(value: gltf::animation::Interpolation) -> Self {
        match value {
            gltf::animation::Interpolation::Step => Interpolation::Step,
            gltf::animation::Interpolation::Linear => Interpolation::Linear,
            gltf::animation::Interpolation::CubicSpline => Interpolation::CubicSpline,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelValues {
    Translation(Vec<Vec3>),
    Rotation(Vec<Quat>),
    Scale(Vec<Vec3>),
}

/// Sampled value of a single channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PropertyValue {
    Translation(Vec3),
    Rotation(Quat),
    Scale(Vec3),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    Translation,
    Rotation,
    Scale,
}

impl PropertyValue {
    pub fn property(&self) -> Property {
        match self {
            PropertyValue::Translation(_) => Property::Translation,
            PropertyValue::Rotation(_) => Property::Rotation,
            PropertyValue::Scale(_) => Property::Scale,
        }
    }

    /// Moves `self` towards `other` by `t`; both must target the same property.
    pub fn blend(self, other: PropertyValue, t: f32) -> PropertyValue {
        match (self, other) {
            (PropertyValue::Translation(a), PropertyValue::Translation(b)) => {
                PropertyValue::Translation(a.lerp(b, t))
            }
            (PropertyValue::Rotation(a), PropertyValue::Rotation(b)) => {
                PropertyValue::Rotation(a.slerp(b, t))
            }
            (PropertyValue::Scale(a), PropertyValue::Scale(b)) => PropertyValue::Scale(a.lerp(b, t)),
            (a, _) => a,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    /// Asset-local node index.
    pub node: usize,
    pub interpolation: Interpolation,
    pub times: Vec<f32>,
    pub values: ChannelValues,
}

enum Segment {
    Single(usize),
    Between { from: usize, to: usize, t: f32, dt: f32 },
}

impl Channel {
    fn segment(&self, time: f32) -> Option<Segment> {
        let first = *self.times.first()?;
        let last_index = self.times.len() - 1;

        if time <= first {
            return Some(Segment::Single(0));
        }

        if time >= self.times[last_index] {
            return Some(Segment::Single(last_index));
        }

        // First keyframe not at or before `time`; the last keyframe never is here
        let to = self.times.partition_point(|&keyframe| keyframe <= time);
        let Some(from) = to.checked_sub(1) else {
            return Some(Segment::Single(0));
        };
        let dt = self.times[to] - self.times[from];

        if dt <= 0.0 {
            return Some(Segment::Single(to));
        }

        Some(Segment::Between {
            from,
            to,
            t: (time - self.times[from]) / dt,
            dt,
        })
    }

    pub fn sample(&self, time: f32) -> Option<PropertyValue> {
        let segment = self.segment(time)?;

        let value = match &self.values {
            ChannelValues::Translation(values) => {
                PropertyValue::Translation(sample_vec3(values, self.interpolation, &segment)?)
            }
            ChannelValues::Scale(values) => {
                PropertyValue::Scale(sample_vec3(values, self.interpolation, &segment)?)
            }
            ChannelValues::Rotation(values) => {
                PropertyValue::Rotation(sample_quat(values, self.interpolation, &segment)?)
            }
        };

        Some(value)
    }
}

fn keyframe_value<T: Copy>(values: &[T], interpolation: Interpolation, keyframe: usize) -> Option<T> {
    match interpolation {
        Interpolation::CubicSpline => values.get(keyframe * 3 + 1).copied(),
        _ => values.get(keyframe).copied(),
    }
}

fn hermite_weights(t: f32) -> [f32; 4] {
    let t2 = t * t;
    let t3 = t2 * t;

    [
        2.0 * t3 - 3.0 * t2 + 1.0,
        t3 - 2.0 * t2 + t,
        -2.0 * t3 + 3.0 * t2,
        t3 - t2,
    ]
}

fn sample_vec3(values: &[Vec3], interpolation: Interpolation, segment: &Segment) -> Option<Vec3> {
    match *segment {
        Segment::Single(keyframe) => keyframe_value(values, interpolation, keyframe),
        Segment::Between { from, to, t, dt } => match interpolation {
            Interpolation::Step => values.get(from).copied(),
            Interpolation::Linear => Some(values.get(from)?.lerp(*values.get(to)?, t)),
            Interpolation::CubicSpline => {
                let v0 = *values.get(from * 3 + 1)?;
                let out_tangent = *values.get(from * 3 + 2)?;
                let in_tangent = *values.get(to * 3)?;
                let v1 = *values.get(to * 3 + 1)?;
                let [h00, h10, h01, h11] = hermite_weights(t);

                Some(v0 * h00 + out_tangent * (h10 * dt) + v1 * h01 + in_tangent * (h11 * dt))
            }
        },
    }
}

fn sample_quat(values: &[Quat], interpolation: Interpolation, segment: &Segment) -> Option<Quat> {
    match *segment {
        Segment::Single(keyframe) => keyframe_value(values, interpolation, keyframe),
        Segment::Between { from, to, t, dt } => match interpolation {
            Interpolation::Step => values.get(from).copied(),
            Interpolation::Linear => Some(values.get(from)?.slerp(*values.get(to)?, t)),
            Interpolation::CubicSpline => {
                let v0 = *values.get(from * 3 + 1)?;
                let out_tangent = *values.get(from * 3 + 2)?;
                let in_tangent = *values.get(to * 3)?;
                let v1 = *values.get(to * 3 + 1)?;
                let [h00, h10, h01, h11] = hermite_weights(t);

                let blended = v0 * h00 + out_tangent * (h10 * dt) + v1 * h01 + in_tangent * (h11 * dt);
                Some(blended.normalize())
            }
        },
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub name: String,
    pub duration: f32,
    pub channels: Vec<Channel>,
}

impl AnimationClip {
    pub fn new(name: impl Into<String>, channels: Vec<Channel>) -> Self {
        let duration = channels
            .iter()
            .filter_map(|channel| channel.times.last().copied())
            .fold(0.0, f32::max);

        Self {
            name: name.into(),
            duration,
            channels,
        }
    }

    pub fn from_gltf(animation: &gltf::Animation, buffers: Buffers) -> AnimationClip {
        let name = animation
            .name()
            .map(String::from)
            .unwrap_or_else(|| format!("Animation {}", animation.index()));

        let mut channels = Vec::new();

        for (channel_index, channel) in animation.channels().enumerate() {
            let reader = channel.reader(|buffer| Some(&buffers[buffer.index()]));

            let (Some(inputs), Some(outputs)) = (reader.read_inputs(), reader.read_outputs())
            else {
                log::warn!("{name}: channel {channel_index} has no keyframe data");
                continue;
            };

            let times: Vec<f32> = inputs.collect();
            if !keyframe_times_are_valid(&times) {
                log::warn!(
                    "{name}: channel {channel_index} has non-finite or decreasing keyframe times"
                );
                continue;
            }

            let values = match outputs {
                gltf::animation::util::ReadOutputs::Translations(values) => {
                    ChannelValues::Translation(values.map(Vec3::from).collect())
                }
                gltf::animation::util::ReadOutputs::Rotations(values) => {
                    ChannelValues::Rotation(values.into_f32().map(Quat::from_array).collect())
                }
                gltf::animation::util::ReadOutputs::Scales(values) => {
                    ChannelValues::Scale(values.map(Vec3::from).collect())
                }
                gltf::animation::util::ReadOutputs::MorphTargetWeights(_) => {
                    log::debug!("{name}: ignoring morph target weight channel");
                    continue;
                }
            };

            channels.push(Channel {
                node: channel.target().node().index(),
                interpolation: channel.sampler().interpolation().into(),
                times,
                values,
            });
        }

        AnimationClip::new(name, channels)
    }
}

fn keyframe_times_are_valid(times: &[f32]) -> bool {
    times.iter().all(|time| time.is_finite()) && times.windows(2).all(|pair| pair[0] <= pair[1])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn translation_channel(interpolation: Interpolation, times: Vec<f32>, values: Vec<Vec3>) -> Channel {
        Channel {
            node: 0,
            interpolation,
            times,
            values: ChannelValues::Translation(values),
        }
    }

    #[test]
    fn duration_is_latest_keyframe() {
        let clip = AnimationClip::new(
            "Walk",
            vec![
                translation_channel(Interpolation::Linear, vec![0.0, 1.5], vec![Vec3::ZERO; 2]),
                translation_channel(Interpolation::Linear, vec![0.0, 2.5], vec![Vec3::ZERO; 2]),
            ],
        );

        assert_eq!(clip.duration, 2.5);
    }

    #[test]
    fn linear_interpolates_between_keyframes() {
        let channel = translation_channel(
            Interpolation::Linear,
            vec![0.0, 1.0, 3.0],
            vec![Vec3::ZERO, Vec3::X, Vec3::new(1.0, 4.0, 0.0)],
        );

        assert_eq!(channel.sample(0.5), Some(PropertyValue::Translation(Vec3::new(0.5, 0.0, 0.0))));
        assert_eq!(channel.sample(2.0), Some(PropertyValue::Translation(Vec3::new(1.0, 2.0, 0.0))));
    }

    #[test]
    fn sampling_clamps_outside_keyframe_range() {
        let channel = translation_channel(Interpolation::Linear, vec![1.0, 2.0], vec![Vec3::X, Vec3::Y]);

        assert_eq!(channel.sample(0.0), Some(PropertyValue::Translation(Vec3::X)));
        assert_eq!(channel.sample(5.0), Some(PropertyValue::Translation(Vec3::Y)));
    }

    #[test]
    fn step_holds_previous_keyframe() {
        let channel = translation_channel(Interpolation::Step, vec![0.0, 1.0], vec![Vec3::X, Vec3::Y]);

        assert_eq!(channel.sample(0.99), Some(PropertyValue::Translation(Vec3::X)));
        assert_eq!(channel.sample(1.0), Some(PropertyValue::Translation(Vec3::Y)));
    }

    #[test]
    fn cubic_spline_hits_keyframe_values() {
        // [in, value, out] per keyframe
        let channel = translation_channel(
            Interpolation::CubicSpline,
            vec![0.0, 1.0],
            vec![Vec3::ZERO, Vec3::X, Vec3::ZERO, Vec3::ZERO, Vec3::Y, Vec3::ZERO],
        );

        assert_eq!(channel.sample(0.0), Some(PropertyValue::Translation(Vec3::X)));
        assert_eq!(channel.sample(1.0), Some(PropertyValue::Translation(Vec3::Y)));

        // Zero tangents reduce to smoothstep, symmetric at the midpoint
        let Some(PropertyValue::Translation(mid)) = channel.sample(0.5) else {
            panic!("expected translation");
        };
        assert!((mid - Vec3::new(0.5, 0.5, 0.0)).length() < 1e-6);
    }

    #[test]
    fn rotation_slerps() {
        let channel = Channel {
            node: 0,
            interpolation: Interpolation::Linear,
            times: vec![0.0, 1.0],
            values: ChannelValues::Rotation(vec![
                Quat::IDENTITY,
                Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            ]),
        };

        let Some(PropertyValue::Rotation(rotation)) = channel.sample(0.5) else {
            panic!("expected rotation");
        };
        assert!(rotation.angle_between(Quat::from_rotation_y(std::f32::consts::FRAC_PI_4)) < 1e-4);
    }

    #[test]
    fn empty_channel_samples_nothing() {
        let channel = translation_channel(Interpolation::Linear, vec![], vec![]);
        assert_eq!(channel.sample(0.0), None);
    }

    #[test]
    fn nan_keyframe_time_does_not_panic() {
        let channel = translation_channel(
            Interpolation::Linear,
            vec![f32::NAN, 1.0],
            vec![Vec3::ZERO, Vec3::X],
        );

        assert!(channel.sample(0.5).is_some());
        assert!(channel.sample(f32::NAN).is_some());
    }

    #[test]
    fn keyframe_times_must_be_finite_and_ordered() {
        assert!(keyframe_times_are_valid(&[0.0, 0.5, 0.5, 1.0]));
        assert!(keyframe_times_are_valid(&[]));
        assert!(!keyframe_times_are_valid(&[f32::NAN, 1.0]));
        assert!(!keyframe_times_are_valid(&[0.0, f32::INFINITY]));
        assert!(!keyframe_times_are_valid(&[1.0, 0.5]));
    }
}
