//! Identity records survive a full emit/parse cycle, and malformed records
//! fail with the precise error kind for the field at fault.

use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::{env, fs, path::PathBuf};

use proptest::prelude::*;

use veil_core::{
    BridgeLine, CryptingParams, IdentityError, ModelSpec, PrivateKey, ServerPrivate,
    ServerPublic, MAGIC_LINE,
};

fn temp_path(name: &str) -> PathBuf {
    let mut path = env::temp_dir();
    path.push(format!("veil_identity_{}_{}", name, std::process::id()));
    path
}

fn addr_strategy() -> impl Strategy<Value = SocketAddr> {
    prop_oneof![
        (any::<u32>(), any::<u16>())
            .prop_map(|(ip, port)| SocketAddr::new(IpAddr::V4(Ipv4Addr::from(ip)), port)),
        (any::<u128>(), any::<u16>())
            .prop_map(|(ip, port)| SocketAddr::new(IpAddr::V6(Ipv6Addr::from(ip)), port)),
    ]
}

fn model_strategy() -> impl Strategy<Value = ModelSpec> {
    ("[a-z]{1,8}", proptest::collection::btree_map("[a-z]{1,6}", "[a-z0-9]{0,8}", 0..4))
        .prop_map(|(name, params)| ModelSpec { name, params })
}

fn public_strategy() -> impl Strategy<Value = ServerPublic> {
    (
        "[a-z0-9]{1,12}",
        addr_strategy(),
        model_strategy(),
        1u32..,
        any::<[u8; 32]>(),
    )
        .prop_map(|(nickname, addr, model, mtu, key_bytes)| {
            ServerPublic::new(
                nickname,
                addr,
                model,
                CryptingParams { mtu },
                PrivateKey::from_bytes(key_bytes).public(),
            )
        })
}

proptest! {
    #[test]
    fn bridge_line_emit_parse_round_trip(public in public_strategy()) {
        let parsed = ServerPublic::from_bridge_line(&public.bridge_line()).unwrap();
        prop_assert_eq!(parsed, public);
    }
}

#[test]
fn save_then_load_preserves_the_identity() {
    let mut model = ModelSpec::new("uniform");
    model.params.insert("rate".to_string(), "25".to_string());
    let identity = ServerPrivate::generate("bridge-a", "203.0.113.9:7777", model).unwrap();

    let path = temp_path("save_load");
    let _ = fs::remove_file(&path);
    identity.save_file(&path).unwrap();

    let loaded = ServerPrivate::load_file(&path).unwrap();
    assert_eq!(loaded, identity);
    assert_eq!(loaded.public(), identity.public());

    fs::remove_file(&path).unwrap();
}

#[test]
fn save_refuses_to_overwrite() {
    let identity =
        ServerPrivate::generate("dup", "203.0.113.9:7000", ModelSpec::new("uniform")).unwrap();
    let path = temp_path("no_overwrite");
    let _ = fs::remove_file(&path);

    identity.save_file(&path).unwrap();
    match identity.save_file(&path) {
        Err(IdentityError::Io(err)) => {
            assert_eq!(err.kind(), std::io::ErrorKind::AlreadyExists)
        }
        other => panic!("expected I/O error, got {other:?}"),
    }

    fs::remove_file(&path).unwrap();
}

#[test]
fn missing_magic_is_its_own_failure() {
    let key_hex = PrivateKey::generate().to_hex();
    let path = temp_path("no_magic");
    fs::write(&path, format!("srv\n127.0.0.1:1111\n{key_hex}\nm=uniform\n")).unwrap();
    assert!(matches!(
        ServerPrivate::load_file(&path),
        Err(IdentityError::Missing("magic line"))
    ));
    fs::remove_file(&path).unwrap();

    let path = temp_path("empty_file");
    fs::write(&path, "").unwrap();
    assert!(matches!(
        ServerPrivate::load_file(&path),
        Err(IdentityError::Missing("magic line"))
    ));
    fs::remove_file(&path).unwrap();
}

#[test]
fn truncated_records_name_the_missing_field() {
    let path = temp_path("truncated");

    fs::write(&path, format!("{MAGIC_LINE}\nsrv\n")).unwrap();
    assert!(matches!(
        ServerPrivate::load_file(&path),
        Err(IdentityError::Missing("network address"))
    ));

    fs::remove_file(&path).unwrap();
    fs::write(&path, format!("{MAGIC_LINE}\nsrv\n127.0.0.1:1111\n")).unwrap();
    assert!(matches!(
        ServerPrivate::load_file(&path),
        Err(IdentityError::Missing("private key"))
    ));
    fs::remove_file(&path).unwrap();
}

#[test]
fn bad_param_line_is_a_syntax_error() {
    let key_hex = PrivateKey::generate().to_hex();
    let path = temp_path("bad_param");
    fs::write(
        &path,
        format!("{MAGIC_LINE}\nsrv\n127.0.0.1:1111\n{key_hex}\nm=uniform\nnot a param\n"),
    )
    .unwrap();
    assert!(matches!(
        ServerPrivate::load_file(&path),
        Err(IdentityError::Syntax)
    ));
    fs::remove_file(&path).unwrap();
}

#[test]
fn unknown_bridge_param_is_reported_by_key() {
    let identity =
        ServerPrivate::generate("srv", "198.51.100.4:9443", ModelSpec::new("uniform")).unwrap();
    let mut bline = identity.public().bridge_line();
    bline.params.insert("zz".to_string(), "1".to_string());

    let err = ServerPublic::from_bridge_line(&bline).unwrap_err();
    assert!(matches!(err, IdentityError::Unacknowledged(ref key) if key == "zz"));
    assert_eq!(err.to_string(), "unacknowledged parameter: zz");
}

#[test]
fn bridge_line_without_public_key_is_missing() {
    let bline = BridgeLine {
        nickname: "srv".to_string(),
        address: "198.51.100.4:9443".to_string(),
        params: BTreeMap::from([("m".to_string(), "uniform".to_string())]),
    };
    assert!(matches!(
        ServerPublic::from_bridge_line(&bline),
        Err(IdentityError::Missing("public key"))
    ));
}
