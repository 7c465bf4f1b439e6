use fieldbind::session::{CookieStore, Session, SessionStore};
use fieldbind::{resolve, to_map, Bind, Value};
use http::{Method, Request};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Address {
    city: String,
    zip: String,
}

#[derive(Debug, Default, PartialEq, Bind)]
struct Signup {
    #[bind(json, session)]
    email: String,
    #[bind(json = "home", session = "addr", serde)]
    address: Address,
    #[bind(json = "prefs", session)]
    preferences: HashMap<String, bool>,
    #[bind(json, form = "nick", query = "-")]
    nickname: Option<String>,
    #[bind(session = "-")]
    password: String,
    scratch: u8,
}

#[test]
fn test_default_keys_and_skips() {
    let descriptor = Signup::descriptor();
    let json: Vec<_> = descriptor.bindings_in("json").map(|b| b.key()).collect();
    assert_eq!(json, ["email", "home", "prefs", "nickname"]);

    let session: Vec<_> = descriptor.bindings_in("session").map(|b| (b.field(), b.key())).collect();
    assert_eq!(
        session,
        [("email", "email"), ("address", "addr"), ("preferences", "preferences")]
    );

    assert_eq!(descriptor.bindings_in("query").count(), 0);
    let namespaces: Vec<_> = descriptor.namespaces().collect();
    assert_eq!(namespaces, ["form", "json", "session"]);
    assert!(descriptor.bindings().iter().all(|b| b.field() != "scratch"));
}

#[test]
fn test_descriptor_is_built_once() {
    assert!(std::ptr::eq(Signup::descriptor(), Signup::descriptor()));
}

#[test]
fn test_serde_field_from_json_body() {
    let req = Request::builder()
        .method(Method::POST)
        .uri("/signup")
        .header("content-type", "application/json")
        .body(
            &br#"{"email": "a@b.c", "home": {"city": "Oslo", "zip": "0150"}, "prefs": {"news": true}, "nickname": "al"}"#[..],
        )
        .unwrap();
    let signup: Signup = fieldbind::bind(req).unwrap();
    assert_eq!(signup.email, "a@b.c");
    assert_eq!(
        signup.address,
        Address {
            city: "Oslo".to_string(),
            zip: "0150".to_string()
        }
    );
    assert_eq!(signup.preferences.get("news"), Some(&true));
    assert_eq!(signup.nickname.as_deref(), Some("al"));
}

#[test]
fn test_serde_field_rejects_wrong_shape() {
    let req = Request::builder()
        .method(Method::POST)
        .uri("/signup")
        .header("content-type", "application/json")
        .body(&br#"{"home": "Oslo"}"#[..])
        .unwrap();
    let err = fieldbind::bind::<Signup, _>(req).unwrap_err();
    assert!(err.to_string().contains("address"), "{err}");
}

#[test]
fn test_optional_field_from_form() {
    let req = Request::builder()
        .method(Method::POST)
        .uri("/signup")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(&b"nick=zed&nickname=ignored"[..])
        .unwrap();
    let signup: Signup = fieldbind::bind(req).unwrap();
    assert_eq!(signup.nickname.as_deref(), Some("zed"));
}

#[test]
fn test_to_map_renders_serde_and_null_fields() {
    let signup = Signup {
        email: "a@b.c".to_string(),
        address: Address {
            city: "Oslo".to_string(),
            zip: "0150".to_string(),
        },
        password: "hunter2".to_string(),
        ..Signup::default()
    };
    let map = to_map(&signup, "json").unwrap();
    assert_eq!(map["nickname"], Value::Null);
    assert_eq!(map["prefs"], Value::Map(Default::default()));
    let Value::Map(home) = &map["home"] else {
        panic!("home should render as a map: {:?}", map["home"]);
    };
    assert_eq!(home["city"], Value::from("Oslo"));
    assert!(!to_map(&signup, "session").unwrap().contains_key("password"));
}

#[test]
fn test_serde_field_survives_session_round_trip() {
    let store = CookieStore::<Signup>::new(b"0123456789abcdef0123456789abcdef", None).unwrap();
    let signup = Signup {
        email: "a@b.c".to_string(),
        address: Address {
            city: "Bergen".to_string(),
            zip: "5003".to_string(),
        },
        preferences: HashMap::from([("news".to_string(), false)]),
        nickname: Some("not stored".to_string()),
        password: "not stored either".to_string(),
        scratch: 7,
    };
    let mut session = Session::new();
    store.save(&mut session, &signup).unwrap();

    let loaded = store.load(&session).unwrap();
    assert_eq!(loaded.email, signup.email);
    assert_eq!(loaded.address, signup.address);
    assert_eq!(loaded.preferences, signup.preferences);
    assert_eq!(loaded.nickname, None);
    assert_eq!(loaded.password, "");
    assert_eq!(loaded.scratch, 0);
}

#[test]
fn test_resolve_with_custom_namespace() {
    #[derive(Debug, Default, Bind)]
    struct Headers {
        #[bind(header = "x-request-id")]
        request_id: String,
        #[bind(header = "x-retry")]
        retry: u8,
    }

    let headers = HashMap::from([("x-request-id", "abc"), ("x-retry", "3")]);
    let mut target = Headers::default();
    let report = resolve(&mut target, true, "header", |key| {
        headers.get(key).map(|v| Value::from(*v))
    })
    .unwrap();
    assert_eq!(report.resolved, 2);
    assert_eq!(target.request_id, "abc");
    assert_eq!(target.retry, 3);
}
