pub mod commands;
pub mod directive;
pub mod profile;
pub mod rules;

pub use commands::{lookup, CmdCategory, CommandSpec};
pub use directive::*;
pub use profile::*;
pub use rules::{hash_password, parse_rules, AclRule, AclRuleError, AclUser};
