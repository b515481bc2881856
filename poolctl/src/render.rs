//! Coloured outline of a resolved pool.

use std::fmt::Write as _;

use colored::Colorize;
use parampool::{
    Pool,
    data::{Group, Item},
    traverse::Visitor,
};

struct Outline {
    depth: usize,
    out: String,
}

impl Outline {
    fn indent(&self) -> String {
        "  ".repeat(self.depth)
    }
}

impl Visitor for Outline {
    fn enter_group(&mut self, _path: &str, group: &Group) {
        let _ = writeln!(
            self.out,
            "{}{}",
            self.indent(),
            format!("[{}]", group.name()).bold().blue()
        );
        self.depth += 1;
    }

    fn leave_group(&mut self, _path: &str, _group: &Group) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn leaf(&mut self, _path: &str, item: &Item) {
        let value = item.value().to_string();
        let value = if item.is_modified() {
            value.green().bold()
        } else {
            value.normal()
        };
        let _ = write!(
            self.out,
            "{}{} = {value} {}",
            self.indent(),
            item.name().cyan(),
            format!("({})", item.kind()).dimmed()
        );
        if let Some(unit) = &item.unit {
            let _ = write!(self.out, " {}", unit.dimmed());
        }
        if item.is_modified() {
            let _ = write!(self.out, " {}", format!("[default: {}]", item.default()).yellow());
        }
        if let Some(help) = &item.help {
            let _ = write!(self.out, "  {}", format!("# {help}").dimmed());
        }
        self.out.push('\n');
    }
}

/// Indented outline of groups and leaves; changed values are highlighted
/// along with their default.
pub fn outline(pool: &Pool) -> String {
    let mut outline = Outline {
        depth: 0,
        out: String::new(),
    };
    pool.walk(&mut outline);
    outline.out
}
