//! Static body model: the markers the pose tool emits, the angle groups of
//! the `.mot` file, and the anatomical bone list.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! named_enum {
    ($(#[$meta:meta])* $vis:vis enum $name:ident { $($variant:ident => $label:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        $vis enum $name { $($variant),+ }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub const fn as_str(self) -> &'static str {
                match self { $($name::$variant => $label),+ }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
        }

        impl FromStr for $name {
            type Err = UnknownName;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim() {
                    $($label => Ok($name::$variant),)+
                    other => Err(UnknownName(other.to_string())),
                }
            }
        }
    };
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown name {0:?}")]
pub struct UnknownName(pub String);

named_enum! {
    pub enum Marker {
        Nose => "Nose",
        Head => "Head",
        Neck => "Neck",
        RShoulder => "RShoulder",
        RElbow => "RElbow",
        RWrist => "RWrist",
        LShoulder => "LShoulder",
        LElbow => "LElbow",
        LWrist => "LWrist",
        Hip => "Hip",
        RHip => "RHip",
        RKnee => "RKnee",
        RAnkle => "RAnkle",
        RBigToe => "RBigToe",
        RSmallToe => "RSmallToe",
        RHeel => "RHeel",
        LHip => "LHip",
        LKnee => "LKnee",
        LAnkle => "LAnkle",
        LBigToe => "LBigToe",
        LSmallToe => "LSmallToe",
        LHeel => "LHeel",
    }
}

named_enum! {
    pub enum AngleGroup {
        RightAnkle => "right ankle",
        LeftAnkle => "left ankle",
        RightKnee => "right knee",
        LeftKnee => "left knee",
        RightHip => "right hip",
        LeftHip => "left hip",
        RightShoulder => "right shoulder",
        LeftShoulder => "left shoulder",
        RightElbow => "right elbow",
        LeftElbow => "left elbow",
        RightForearm => "right forearm",
        LeftForearm => "left forearm",
        RightFoot => "right foot",
        LeftFoot => "left foot",
        Pelvis => "pelvis",
        Trunk => "trunk",
        Head => "head",
    }
}

impl Marker {
    /// The marker trails are recentred on.
    pub const REFERENCE: Marker = Marker::Hip;

    /// Angle group whose `.mot` column describes this marker's joint.
    pub const fn angle_group(self) -> AngleGroup {
        use AngleGroup as G;
        match self {
            Marker::RAnkle => G::RightAnkle,
            Marker::LAnkle => G::LeftAnkle,
            Marker::RKnee => G::RightKnee,
            Marker::LKnee => G::LeftKnee,
            Marker::RHip => G::RightHip,
            Marker::LHip => G::LeftHip,
            Marker::RShoulder => G::RightShoulder,
            Marker::LShoulder => G::LeftShoulder,
            Marker::RElbow => G::RightElbow,
            Marker::LElbow => G::LeftElbow,
            Marker::RWrist => G::RightForearm,
            Marker::LWrist => G::LeftForearm,
            Marker::RBigToe | Marker::RSmallToe | Marker::RHeel => G::RightFoot,
            Marker::LBigToe | Marker::LSmallToe | Marker::LHeel => G::LeftFoot,
            Marker::Hip => G::Pelvis,
            Marker::Neck => G::Trunk,
            Marker::Head | Marker::Nose => G::Head,
        }
    }
}

/// Resolve a marker name from a `.trc` header to its angle group, if the name
/// belongs to the body model.
pub fn angle_group_for(marker_name: &str) -> Option<AngleGroup> {
    marker_name.parse::<Marker>().ok().map(Marker::angle_group)
}

pub const SKELETON_BONES: &[(Marker, Marker)] = &[
    (Marker::Nose, Marker::Neck),
    (Marker::Neck, Marker::Head),
    (Marker::Neck, Marker::RShoulder),
    (Marker::RShoulder, Marker::RElbow),
    (Marker::RElbow, Marker::RWrist),
    (Marker::Neck, Marker::LShoulder),
    (Marker::LShoulder, Marker::LElbow),
    (Marker::LElbow, Marker::LWrist),
    (Marker::Neck, Marker::Hip),
    (Marker::Hip, Marker::RHip),
    (Marker::RHip, Marker::RKnee),
    (Marker::RKnee, Marker::RAnkle),
    (Marker::RAnkle, Marker::RHeel),
    (Marker::RAnkle, Marker::RBigToe),
    (Marker::RAnkle, Marker::RSmallToe),
    (Marker::Hip, Marker::LHip),
    (Marker::LHip, Marker::LKnee),
    (Marker::LKnee, Marker::LAnkle),
    (Marker::LAnkle, Marker::LHeel),
    (Marker::LAnkle, Marker::LBigToe),
    (Marker::LAnkle, Marker::LSmallToe),
];
