//! Cross-version and property tests for the codec.

use codec::Codec;
use proptest::prelude::*;
use protocol::ErrorKind;
use serde::{Deserialize, Serialize};

mod v1 {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Person {
        pub name: String,
        pub age: u32,
    }
}

mod v2 {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Person {
        pub name: String,
        pub age: u32,
        #[serde(default)]
        pub email: Option<String>,
        #[serde(default)]
        pub tags: Vec<String>,
    }
}

fn sender() -> Codec {
    Codec::with_registrations(|engine| {
        engine.register::<v2::Person>();
        Ok(())
    })
}

fn receiver() -> Codec {
    Codec::with_registrations(|engine| {
        engine.register::<v1::Person>();
        Ok(())
    })
}

#[test]
fn older_receiver_ignores_new_fields() {
    let payload = sender()
        .encode(&v2::Person {
            name: "Ann".into(),
            age: 30,
            email: Some("ann@example.com".into()),
            tags: vec!["vip".into()],
        })
        .unwrap();

    let decoded: v1::Person = receiver().decode(payload.as_bytes()).unwrap();
    assert_eq!(
        decoded,
        v1::Person {
            name: "Ann".into(),
            age: 30
        }
    );
}

#[test]
fn newer_receiver_defaults_missing_fields() {
    let payload = receiver()
        .encode(&v1::Person {
            name: "Bo".into(),
            age: 5,
        })
        .unwrap();

    let decoded: v2::Person = sender().decode(payload.as_bytes()).unwrap();
    assert_eq!(decoded.name, "Bo");
    assert_eq!(decoded.email, None);
    assert!(decoded.tags.is_empty());
}

#[test]
fn stable_wire_names_decouple_peers_from_rust_paths() {
    let sender = Codec::with_registrations(|engine| {
        engine.register::<u64>();
        engine.register_as::<v2::Person>("people.person");
        Ok(())
    });
    let receiver = Codec::with_registrations(|engine| {
        engine.register_as::<v1::Person>("people.person");
        Ok(())
    });

    let payload = sender
        .encode(&v2::Person {
            name: "Di".into(),
            age: 44,
            email: None,
            tags: Vec::new(),
        })
        .unwrap();

    let decoded: v1::Person = receiver.decode(payload.as_bytes()).unwrap();
    assert_eq!(decoded.name, "Di");
    assert_eq!(decoded.age, 44);
}

#[test]
fn unregistered_types_do_not_cross_versions() {
    let payload = Codec::new()
        .encode(&v1::Person {
            name: "Cy".into(),
            age: 1,
        })
        .unwrap();
    let err = Codec::new().decode::<v2::Person>(payload.as_bytes()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Serialization);
    assert!(err.to_string().contains("v2::Person"));
}

#[test]
fn concurrent_callers_share_one_codec() {
    let codec = Codec::new();
    let workers: Vec<_> = (0..8u32)
        .map(|n| {
            let codec = codec.clone();
            std::thread::spawn(move || {
                for age in 0..50 {
                    let person = v1::Person {
                        name: format!("worker-{n}"),
                        age,
                    };
                    let payload = codec.encode(&person).unwrap();
                    assert_eq!(codec.decode::<v1::Person>(payload.as_bytes()).unwrap(), person);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
}

proptest! {
    #[test]
    fn any_person_round_trips(
        name in ".*",
        age in any::<u32>(),
        email in proptest::option::of("[a-z]{1,12}@[a-z]{1,8}\\.com"),
        tags in proptest::collection::vec("[a-z]{0,6}", 0..4),
    ) {
        let codec = Codec::new();
        let person = v2::Person { name, age, email, tags };
        let payload = codec.encode(&person).unwrap();
        prop_assert!(!payload.is_empty());
        prop_assert_eq!(codec.decode::<v2::Person>(payload.as_bytes()).unwrap(), person);
    }

    #[test]
    fn any_byte_vector_round_trips(bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        let codec = Codec::new();
        let payload = codec.encode(&bytes).unwrap();
        prop_assert_eq!(codec.decode::<Vec<u8>>(payload.as_bytes()).unwrap(), bytes);
    }
}
