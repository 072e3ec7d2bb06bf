use eventide_domain::domain_event::DomainEvent;
use eventide_domain::versioned::VersionedTypeRegistry;
use eventide_macros::{domain_event, versioned};

#[versioned]
struct Opened {
    owner: String,
}

#[versioned]
struct Renamed {
    to: String,
}

#[domain_event]
enum AccountEvent {
    Opened(Opened),
    Renamed(Renamed),
}

fn main() {
    let mut registry = VersionedTypeRegistry::new();
    AccountEvent::register_types(&mut registry);
    assert_eq!(registry.len(), 2);

    let event = AccountEvent::Renamed(Renamed { to: "b".into() });
    let payload = event.payload();
    assert!(payload.downcast_ref::<Renamed>().is_some());

    let back = AccountEvent::from_payload(Box::new(Opened {
        owner: "a".into(),
    }))
    .unwrap();
    assert!(matches!(back, AccountEvent::Opened(Opened { ref owner }) if owner == "a"));
    let _ = format!("{:?}", back.clone());
}
