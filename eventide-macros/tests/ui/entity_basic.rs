use eventide_domain::entity::Entity;
use eventide_domain::value_object::Version;
use eventide_macros::{entity, entity_id};

#[entity_id]
struct AccountId(String);

#[entity(id = AccountId)]
#[derive(Clone)]
struct Account {
    balance: i64,
}

// 默认以 String 作为标识
#[entity(debug = false)]
struct Thingy {
    name: String,
}

impl std::fmt::Debug for Thingy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Thingy({})", self.id)
    }
}

fn main() {
    let mut account = Account::new(AccountId::new("acc-1".into()), Version::from_value(3));
    assert_eq!(account.id().to_string(), "acc-1");
    assert_eq!(account.version().value(), 3);
    assert_eq!(account.balance, 0);

    account.set_version(account.version().next());
    assert_eq!(account.version().value(), 4);
    let _ = format!("{:?}", account.clone());

    let thingy = Thingy::new("t-1".to_string(), Version::new());
    assert!(thingy.version().is_new());
    assert!(thingy.name.is_empty());
    let _ = format!("{:?}", thingy);
}
