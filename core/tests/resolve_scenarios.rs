//! End-to-end resolution through the public API.

use std::time::Duration;

use command_router_core::{
    Cause, Command, Destination, ErrorKind, OperandError, Router, Slot, TextCodec,
};

fn noop(names: &str) -> Command {
    Command::from_fn(names, |_| Ok(()))
}

struct PrintTree {
    router: Router,
    verbose: Slot<bool>,
    first: Slot<String>,
    second: Slot<String>,
}

/// `myapp` with recursive `-v` and a required subcommand `print`, which takes
/// a required `first` and an optional `second` operand.
fn print_tree() -> PrintTree {
    let verbose = Slot::new(false);
    let first = Slot::new(String::new());
    let second = Slot::new(String::from("fallback"));

    let mut print = noop("print");
    print.operand(&first, true, "first", "First value");
    print.operand(&second, false, "second", "Second value");

    let mut root = noop("myapp").with_subcommand(print).require_subcommand();
    root.flag_recursive(&verbose, "v|verbose", "Verbose output");

    PrintTree {
        router: Router::new(root),
        verbose,
        first,
        second,
    }
}

#[test]
fn test_recursive_flag_on_child_and_both_operands() {
    let mut tree = print_tree();
    let id = tree
        .router
        .resolve(["print", "-v", "hello", "world"])
        .unwrap();

    assert_eq!(tree.router.node(id).name(), "print");
    assert!(tree.verbose.get());
    assert_eq!(tree.first.get(), "hello");
    assert_eq!(tree.second.get(), "world");
}

#[test]
fn test_optional_operand_keeps_default() {
    let mut tree = print_tree();
    let id = tree.router.resolve(["print", "hello"]).unwrap();

    assert_eq!(tree.router.node(id).name(), "print");
    assert!(!tree.verbose.get());
    assert_eq!(tree.first.get(), "hello");
    assert_eq!(tree.second.get(), "fallback");
}

#[test]
fn test_missing_required_operand() {
    let mut tree = print_tree();
    let err = tree.router.resolve(["print"]).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::OperandMissing);
    assert_eq!(err.subject(), Some("first"));
    assert_eq!(err.command_name(), "print");
    assert!(matches!(
        err.cause(),
        Cause::Operand(OperandError::Missing { name }) if name == "first"
    ));
    assert_eq!(err.user_message(), "Operand \"first\" is required");
}

#[test]
fn test_empty_input_requires_subcommand() {
    let mut tree = print_tree();
    let err = tree.router.resolve(Vec::<String>::new()).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::SubcommandRequired);
    assert_eq!(err.command(), tree.router.root());
    assert_eq!(err.to_string(), "command myapp: subcommand required");
}

#[test]
fn test_flag_hydration_failure_names_flag() {
    let count = Slot::new(0_i64);
    let mut root = noop("app");
    root.flag(&count, "count", "");
    let mut router = Router::new(root);

    let err = router.resolve(["--count=notanumber"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FlagHydrate);
    assert_eq!(err.subject(), Some("count"));
    assert_eq!(count.get(), 0);
}

#[test]
fn test_alias_matches_first_child() {
    let hits = Slot::new(Vec::<String>::new());
    let (hello_hits, goodbye_hits) = (hits.clone(), hits.clone());

    let hello = Command::from_fn("hello|hi", move |ctx| {
        hello_hits.update(|h| h.push(ctx.command().name().to_string()));
        Ok(())
    });
    let goodbye = Command::from_fn("goodbye", move |ctx| {
        goodbye_hits.update(|h| h.push(ctx.command().name().to_string()));
        Ok(())
    });
    let mut router = Router::new(noop("app").with_subcommands([hello, goodbye]));

    let id = router.resolve(["hi"]).unwrap();
    assert_eq!(router.node(id).name(), "hello");
    router.handle_resolved().unwrap();
    assert_eq!(hits.get(), ["hello"]);
}

#[test]
fn test_recursive_flag_reaches_grandchildren_by_alias() {
    let level = Slot::new(String::new());
    let mut root = noop("app").with_subcommand(noop("remote").with_subcommand(noop("add")));
    root.flag_recursive(&level, "level|l", "Log level");
    let mut router = Router::new(root);

    let id = router.resolve(["remote", "add", "-l", "debug"]).unwrap();
    assert_eq!(router.node(id).name(), "add");
    assert_eq!(level.get(), "debug");

    let add = router.find(&["remote", "add"]).unwrap();
    let flag = router.node(add).flags.get("level").unwrap();
    assert!(flag.destination().same_target(&Destination::from(&level)));
    assert_eq!(flag.description, "Log level");
}

#[test]
fn test_repeated_resolves_do_not_duplicate_recursive_flags() {
    let mut tree = print_tree();
    for _ in 0..3 {
        tree.router.resolve(["print", "x"]).unwrap();
    }

    let print = tree.router.find(&["print"]).unwrap();
    assert_eq!(tree.router.node(print).flags.len(), 1);
    assert_eq!(tree.router.node(tree.router.root()).flags.len(), 1);
}

#[test]
fn test_flags_stop_at_subcommand_token() {
    let depth = Slot::new(0_u8);
    let mut leaf = noop("leaf");
    leaf.flag(&depth, "depth", "");
    let mut router = Router::new(noop("app").with_subcommand(leaf));

    let err = router.resolve(["--depth=2", "leaf"]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FlagUnrecognized);
    assert_eq!(err.command(), router.root());

    router.resolve(["leaf", "--depth", "2"]).unwrap();
    assert_eq!(depth.get(), 2);
}

#[test]
fn test_double_dash_ends_flags() {
    let verbose = Slot::new(false);
    let value = Slot::new(String::new());
    let mut root = noop("app");
    root.flag(&verbose, "v", "");
    root.operand(&value, true, "value", "");
    let mut router = Router::new(root);

    router.resolve(["--", "-v"]).unwrap();
    assert!(!verbose.get());
    assert_eq!(value.get(), "-v");
}

#[test]
fn test_typed_destinations() {
    #[derive(Default)]
    struct Upper(String);

    impl TextCodec for Upper {
        fn encode(&self) -> String {
            self.0.clone()
        }

        fn decode(&mut self, raw: &str) -> Result<(), command_router_core::BoxError> {
            self.0 = raw.to_uppercase();
            Ok(())
        }
    }

    let wait = Slot::new(Duration::ZERO);
    let ratio = Slot::new(0.0_f64);
    let name = Slot::new(Upper::default());
    let tags = Slot::new(Vec::<String>::new());
    let sink = tags.clone();

    let mut root = noop("app");
    root.flag(&wait, "wait", "");
    root.flag(&ratio, "ratio", "");
    root.flag(Destination::codec(&name), "name", "");
    root.flag(
        Destination::setter(move |raw| {
            sink.update(|t| t.push(raw.to_string()));
            Ok(())
        }),
        "tag",
        "",
    );
    let mut router = Router::new(root);

    router
        .resolve([
            "--wait", "1m30s", "--ratio=0.25", "--name", "ada", "--tag=a", "--tag", "b",
        ])
        .unwrap();

    assert_eq!(wait.get(), Duration::from_secs(90));
    assert_eq!(ratio.get(), 0.25);
    assert_eq!(name.borrow().0, "ADA");
    assert_eq!(tags.get(), ["a", "b"]);
}

#[test]
fn test_usage_for_error_command() {
    let mut tree = print_tree();
    let err = tree.router.resolve(["print"]).unwrap_err();

    let usage = tree.router.usage(err.command());
    assert!(usage.starts_with("Usage:\n\n  myapp [FLAGS] print [FLAGS] <first> [second]\n"));
    assert!(usage.contains("Flags for print:"));
}

#[test]
fn test_oversized_duration_fails_instead_of_wrapping() {
    let wait = Slot::new(Duration::ZERO);
    let mut root = noop("app");
    root.flag(&wait, "wait", "");
    let mut router = Router::new(root);

    let err = router
        .resolve(["--wait=94522879700260684295381835.9h"])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::FlagHydrate);
    assert_eq!(err.subject(), Some("wait"));
    assert!(err.user_message().contains("is not a valid duration"));
    assert_eq!(wait.get(), Duration::ZERO);
}

#[test]
fn test_empty_token_never_selects_a_subcommand() {
    let value = Slot::new(String::from("unset"));
    let mut root = noop("app").with_subcommands([noop("a"), noop("b")]);
    root.operand(&value, false, "value", "");
    let mut router = Router::new(root);

    let id = router.resolve([""]).unwrap();
    assert_eq!(id, router.root());
    assert_eq!(value.get(), "");
    assert!(!router.node(router.find(&["a"]).unwrap()).is_called());
}
