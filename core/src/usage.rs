//! Plain-text usage rendering.
//!
//! [`render`] describes one command in the context of its ancestors:
//!
//! ```text
//! Usage:
//!
//!   myapp [FLAGS] print [FLAGS] <first> [second]
//!
//!     Print operands
//!
//! Flags for print:
//!
//!     -v, --verbose
//!         Enable verbose output
//! ```

use std::fmt::Write;

use crate::command::CommandNode;
use crate::flags::Flag;
use crate::router::{NodeId, Router};

const NAME_WIDTH: usize = 18;

/// Renders usage text for `id`.
///
/// Recursive flags inherited from ancestors appear once the router has
/// resolved at least once.
pub fn render(router: &Router, id: NodeId) -> String {
    let node = router.node(id);
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Usage:\n\n  {}{}",
        command_line(router, id),
        subcommands_and_operands(router, node)
    );

    if !node.description.is_empty() {
        let _ = writeln!(out, "\n    {}", node.description);
    }

    let flags: Vec<&Flag> = node.flags.flags().iter().filter(|f| !f.hidden).collect();
    if !flags.is_empty() {
        let _ = writeln!(out, "\nFlags for {}:\n", node.name());
        for flag in flags {
            let _ = writeln!(out, "    {}", flag_line(flag));
            if !flag.description.is_empty() {
                let _ = writeln!(out, "        {}", flag.description);
            }
        }
    }

    if !node.aliases().is_empty() {
        let _ = writeln!(
            out,
            "\nAliases for {}:\n\n      {}",
            node.name(),
            node.aliases().join(", ")
        );
    }

    let subs = visible_subcommands(router, node);
    if !subs.is_empty() {
        let _ = writeln!(out, "\nSubcommands for {}:", node.name());
        for (category, description) in categories(node, &subs) {
            let members: Vec<&CommandNode> =
                subs.iter().copied().filter(|s| s.category == category).collect();
            if members.is_empty() {
                continue;
            }

            out.push('\n');
            if !category.is_empty() {
                let line = format!("  {category:<NAME_WIDTH$} {description}");
                let _ = writeln!(out, "{}", line.trim_end());
            }
            for sub in members {
                let line = format!("    {:<NAME_WIDTH$} {}", sub.name(), sub.description);
                let _ = writeln!(out, "{}", line.trim_end());
            }
        }
    }

    out
}

fn command_line(router: &Router, id: NodeId) -> String {
    router
        .lineage(id)
        .into_iter()
        .map(|ancestor| {
            let node = router.node(ancestor);
            if node.flags.is_empty() {
                node.name().to_string()
            } else {
                format!("{} [FLAGS]", node.name())
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn visible_subcommands<'a>(router: &'a Router, node: &CommandNode) -> Vec<&'a CommandNode> {
    node.children()
        .iter()
        .map(|&child| router.node(child))
        .filter(|child| !child.hide_usage)
        .collect()
}

/// `{a|b}` or `[a|b]` for subcommands, then operand hints; both together
/// read as `{[a|b] | <op>}`.
fn subcommands_and_operands(router: &Router, node: &CommandNode) -> String {
    let subs: Vec<&str> = visible_subcommands(router, node)
        .into_iter()
        .map(CommandNode::name)
        .collect();
    let operands: Vec<&str> = node.operands.operands().iter().map(|o| o.hint()).collect();

    if subs.is_empty() {
        if operands.is_empty() {
            return String::new();
        }
        return format!(" {}", operands.join(" "));
    }

    let (open, close) = if node.subcommand_required {
        ('{', '}')
    } else {
        ('[', ']')
    };
    let subs = format!("{open}{}{close}", subs.join("|"));
    if operands.is_empty() {
        format!(" {subs}")
    } else {
        format!(" {{{subs} | {}}}", operands.join(" "))
    }
}

/// Short names (`-v`) come before long ones (`--verbose`); registration
/// order is kept within each group.
fn flag_line(flag: &Flag) -> String {
    let (short, long): (Vec<&String>, Vec<&String>) = flag
        .names()
        .iter()
        .partition(|name| name.chars().count() == 1);
    let mut line = short
        .into_iter()
        .map(|name| format!("-{name}"))
        .chain(long.into_iter().map(|name| format!("--{name}")))
        .collect::<Vec<_>>()
        .join(", ");
    if !flag.destination().is_bool() {
        let _ = write!(line, "  ={}", flag.type_name);
    }
    if !flag.default_text.is_empty() {
        let _ = write!(line, "    default: {}", flag.default_text);
    }
    line
}

/// Category order: `category_order` entries first, then categories in order
/// of first appearance among the subcommands.
fn categories(node: &CommandNode, subs: &[&CommandNode]) -> Vec<(String, String)> {
    let mut order: Vec<(String, String)> = node
        .category_order
        .iter()
        .map(|entry| {
            let (name, description) = entry.split_once('|').unwrap_or((entry.as_str(), ""));
            (name.to_string(), description.to_string())
        })
        .collect();

    for sub in subs {
        if !order.iter().any(|(name, _)| *name == sub.category) {
            order.push((sub.category.clone(), String::new()));
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use crate::{Command, Slot};

    use super::*;

    fn noop(names: &str) -> Command {
        Command::from_fn(names, |_| Ok(()))
    }

    fn scenario() -> (Router, Slot<bool>) {
        let verbose = Slot::new(false);
        let mut print = noop("print|p").with_description("Print operands");
        print.operand(&Slot::new(String::new()), true, "first", "");
        print.operand(&Slot::new(String::new()), false, "second", "");

        let mut root = noop("myapp").with_subcommand(print).require_subcommand();
        root.flag_recursive(&verbose, "verbose|v", "Enable verbose output");
        (Router::new(root), verbose)
    }

    #[test]
    fn test_root_usage_lists_subcommands() {
        let (router, _) = scenario();
        let expected = format!(
            "Usage:\n\n  myapp [FLAGS] {{print}}\n\n\
             Flags for myapp:\n\n    -v, --verbose\n        Enable verbose output\n\n\
             Subcommands for myapp:\n\n    {:<18} Print operands\n",
            "print"
        );
        assert_eq!(render(&router, router.root()), expected);
    }

    #[test]
    fn test_resolved_usage_includes_ancestors_and_inherited_flags() {
        let (mut router, _) = scenario();
        let id = router.resolve(["print", "x"]).unwrap();

        let expected = "Usage:\n\n  myapp [FLAGS] print [FLAGS] <first> [second]\n\n    \
                        Print operands\n\nFlags for print:\n\n    -v, --verbose\n        \
                        Enable verbose output\n\nAliases for print:\n\n      p\n";
        assert_eq!(router.usage(id), expected);
    }

    #[test]
    fn test_subcommands_and_operands_together() {
        let mut root = noop("tool").with_subcommand(noop("sync"));
        root.operand(&Slot::new(String::new()), false, "path", "");
        let router = Router::new(root);

        let usage = render(&router, router.root());
        assert!(usage.contains("  tool {[sync] | [path]}\n"), "{usage}");
    }

    #[test]
    fn test_flag_line_puts_short_names_first() {
        let mut root = noop("tool");
        root.flag(&Slot::new(String::from("x")), "info|i", "");
        root.flag(&Slot::new(3_u32), "n", "").hide();
        let router = Router::new(root);

        let usage = render(&router, router.root());
        assert!(usage.contains("    -i, --info  =STRING    default: x\n"), "{usage}");
        assert!(!usage.contains("-n"), "{usage}");
    }

    #[test]
    fn test_categories_follow_declared_order() {
        let router = Router::new(
            noop("myapp")
                .with_category_order(["Salutations|Salutations-related", "Informational"])
                .with_subcommands([
                    noop("details").with_category("Informational"),
                    noop("hello")
                        .with_category("Salutations")
                        .with_description("Show hello"),
                    noop("secret").with_category("Salutations").hidden(),
                    noop("misc"),
                ]),
        );

        let usage = render(&router, router.root());
        let expected_tail = format!(
            "Subcommands for myapp:\n\n  {:<18} Salutations-related\n    {:<18} Show hello\n\n  \
             Informational\n    details\n\n    misc\n",
            "Salutations", "hello"
        );
        assert!(usage.ends_with(&expected_tail), "{usage}");
        assert!(usage.contains("  myapp [details|hello|misc]\n"), "{usage}");
    }
}
