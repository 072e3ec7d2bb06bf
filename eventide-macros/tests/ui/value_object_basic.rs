use eventide_macros::value_object;

#[value_object]
struct Money {
    currency: String,
    cents: i64,
}

#[value_object(ordered = true)]
struct Sequence(u64);

#[value_object(debug = false, ordered = true)]
struct Opaque(u32);

#[value_object]
enum Tier {
    #[default]
    Basic,
    Premium,
}

fn main() {
    let money = Money {
        currency: "EUR".into(),
        cents: 250,
    };
    assert_eq!(money.clone(), money);
    assert_eq!(Money::default().cents, 0);
    let json = serde_json::to_value(&money).unwrap();
    assert_eq!(json["cents"], 250);

    // 有序值对象可比较、可复制，单字段按内部值序列化
    let a = Sequence(1);
    let b = a;
    assert!(Sequence(2) > a);
    assert_eq!(serde_json::to_string(&b).unwrap(), "1");
    let back: Sequence = serde_json::from_str("7").unwrap();
    assert_eq!(back, Sequence(7));

    assert!(Opaque(1) < Opaque(2));

    let tier: Tier = Default::default();
    assert_eq!(format!("{tier:?}"), "Basic");
    assert_eq!(serde_json::to_string(&Tier::Premium).unwrap(), "\"Premium\"");
}
