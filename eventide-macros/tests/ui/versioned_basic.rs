use eventide_domain::versioned::{VersionedTag, VersionedType, VersionedTypeRegistry};
use eventide_macros::versioned;

// 类型名约定：("ThingyPinged", 1)
#[versioned]
struct OldThingyPinged {
    message: String,
}

// 类型名约定：("ThingyPinged", 2)
#[versioned]
struct ThingyPingedV2 {
    message: String,
    count: u32,
}

#[versioned(name = "ThingyPinged", version = 3)]
struct ThingyPinged {
    text: String,
    count: u32,
}

#[versioned]
enum Level {
    Low,
    High { reason: String },
}

fn main() {
    assert_eq!(OldThingyPinged::VERSIONED_TAG, None);
    assert_eq!(
        ThingyPinged::VERSIONED_TAG,
        Some(VersionedTag::new("ThingyPinged", 3))
    );

    let registry = VersionedTypeRegistry::new()
        .with::<OldThingyPinged>()
        .with::<ThingyPingedV2>()
        .with::<ThingyPinged>()
        .with::<Level>();
    assert_eq!(registry.len(), 4);
    assert_eq!(registry.latest("ThingyPinged").unwrap().version(), 3);

    let v2 = ThingyPingedV2 {
        message: "m".into(),
        count: 1,
    };
    assert_eq!(v2.clone(), v2);
    let _ = format!("{:?}", Level::Low);
}
