use eventide_macros::entity_id;

#[entity_id]
struct UserId(String);

#[entity_id(debug = false)]
struct ProfileId(u64);

impl std::fmt::Debug for ProfileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ProfileId(..)")
    }
}

fn main() {
    let id = UserId::new("u-1".to_string());
    let _ = format!("{:?}", id);
    assert_eq!(id.to_string(), "u-1");
    let parsed: UserId = "u-1".parse().unwrap();
    assert_eq!(parsed, id);
    let raw: String = id.into();
    assert_eq!(raw, "u-1");

    let pid: ProfileId = "42".parse().unwrap();
    assert_eq!(pid.as_ref(), &42);
    let _ = format!("{:?}", pid);
}
