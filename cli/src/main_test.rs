use super::*;

#[test]
fn parse_arg_reads_json_values() {
    assert_eq!(parse_arg("42"), json!(42));
    assert_eq!(parse_arg(r#"{"a":[1,true]}"#), json!({"a": [1, true]}));
    assert_eq!(parse_arg(r#""quoted""#), json!("quoted"));
}

#[test]
fn parse_arg_falls_back_to_plain_string() {
    assert_eq!(parse_arg("hello world"), json!("hello world"));
    assert_eq!(parse_arg(""), json!(""));
}

#[test]
fn hubs_with_appends_missing_target_once() {
    let hubs = vec!["chatHub".to_owned()];
    assert_eq!(hubs_with(&hubs, "chatHub"), ["chatHub"]);
    assert_eq!(hubs_with(&hubs, "statusHub"), ["chatHub", "statusHub"]);
    assert_eq!(hubs_with(&[], "chatHub"), ["chatHub"]);
}

#[test]
fn cli_parses_call_with_repeated_hubs() {
    let cli = Cli::try_parse_from([
        "signalr-cli", "--host", "example.test", "--hub", "a", "--hub", "b", "call", "a", "send", "\"hi\"", "2",
    ])
    .unwrap();
    assert_eq!(cli.scheme, "https");
    assert_eq!(cli.hubs, ["a", "b"]);
    assert_eq!(cli.timeout_secs, 15);
    let Command::Call { hub, method, args } = cli.command else {
        panic!("expected call command");
    };
    assert_eq!((hub.as_str(), method.as_str()), ("a", "send"));
    assert_eq!(args, ["\"hi\"", "2"]);
}

#[test]
fn cli_parses_listen() {
    let cli = Cli::try_parse_from(["signalr-cli", "--host", "h", "--scheme", "http", "--hub", "x", "listen"]).unwrap();
    assert_eq!(cli.scheme, "http");
    assert!(matches!(cli.command, Command::Listen));
}
