use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;

use globset::{Glob, GlobSet, GlobSetBuilder};
use sha2::{Digest, Sha256};

use super::commands::{self, category_mask};
use super::directive::AclCategory;

/// Ошибка разбора или применения ACL-правила. Текст повторяет формат ответа
/// Redis на неверный модификатор `ACL SETUSER`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("ERR Error in ACL SETUSER modifier '{rule}': {reason}")]
pub struct AclRuleError {
    pub rule: String,
    pub reason: &'static str,
}

/// Представляет одно ACL-правило, разобранное из токена `ACL SETUSER`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AclRule {
    /// Включить пользователя (`on`).
    On,
    /// Выключить пользователя (`off`).
    Off,
    /// Добавить пароль (`>password`). Хранится только SHA-256.
    Password(String),
    /// Удалить пароль (`<password`).
    RemovePassword(String),
    /// Разрешить вход без пароля (`nopass`).
    NoPass,
    /// Сбросить пароли (`resetpass`).
    ResetPass,
    /// Разрешить категорию (`+@read`, `+@all`, `allcommands`).
    AllowCategory(AclCategory),
    /// Запретить категорию (`-@admin`, `-@all`, `nocommands`).
    DenyCategory(AclCategory),
    /// Разрешить команду (`+get`).
    AllowCommand(&'static str),
    /// Запретить команду (`-flushall`).
    DenyCommand(&'static str),
    /// Разрешить команду только с указанным первым аргументом (`+select|0`).
    AllowFirstArg { command: &'static str, arg: String },
    /// Добавить шаблон ключей (`~pattern`).
    KeyPattern(String),
    /// Все ключи (`allkeys`, `~*`).
    AllKeys,
    /// Сбросить шаблоны ключей (`resetkeys`).
    ResetKeys,
    /// Добавить шаблон каналов Pub/Sub (`&pattern`).
    ChannelPattern(String),
    /// Все каналы (`allchannels`, `&*`).
    AllChannels,
    /// Сбросить шаблоны каналов (`resetchannels`).
    ResetChannels,
}

/// Пользователь ACL с вычисленными правами.
///
/// Правила применяются строго по порядку, как в Redis: последнее правило,
/// касающееся команды, побеждает. Новый пользователь выключен и не имеет
/// ни паролей, ни команд, ни ключей, ни каналов.
#[derive(Debug, Clone)]
pub struct AclUser {
    /// Имя пользователя.
    pub username: String,
    /// Флаг, обозначающий, включён ли пользователь.
    pub enabled: bool,
    /// SHA-256 паролей (hex).
    pub password_hashes: Vec<String>,
    /// `nopass`.
    pub nopass: bool,
    /// Разрешённые известные команды (бит на команду).
    allowed_commands: u128,
    /// Команды вне таблицы разрешены: был `+@all`, после него не было
    /// запрета категории. Запрет отдельной команды флаг не снимает.
    all_commands: bool,
    /// Разрешённые первые аргументы для команд, которые сами запрещены.
    allowed_first_args: HashMap<usize, BTreeSet<String>>,
    /// Команды-правила в порядке применения (для `ACL GETUSER`).
    command_rules: Vec<String>,
    /// "Сырые" шаблоны ключей в виде `Glob`.
    raw_key_patterns: Vec<Glob>,
    /// Скомпилированный набор шаблонов ключей.
    key_patterns: GlobSet,
    /// "Сырые" шаблоны каналов в виде `Glob`.
    raw_channel_patterns: Vec<Glob>,
    /// Скомпилированный набор шаблонов каналов.
    channel_patterns: GlobSet,
}

impl AclUser {
    /// Создаёт нового пользователя с настройками Redis по умолчанию.
    pub fn new(username: &str) -> Self {
        Self {
            username: username.to_string(),
            enabled: false,
            password_hashes: Vec::new(),
            nopass: false,
            allowed_commands: 0,
            all_commands: false,
            allowed_first_args: HashMap::new(),
            command_rules: Vec::new(),
            raw_key_patterns: Vec::new(),
            key_patterns: GlobSet::empty(),
            raw_channel_patterns: Vec::new(),
            channel_patterns: GlobSet::empty(),
        }
    }

    /// Применяет правила по порядку.
    ///
    /// Если хотя бы одно правило недопустимо, пользователь не меняется.
    pub fn apply_rules(
        &mut self,
        rules: &[AclRule],
    ) -> Result<(), AclRuleError> {
        let mut next = self.clone();
        for rule in rules {
            next.apply(rule)?;
        }
        next.rebuild_patterns()?;
        *self = next;
        Ok(())
    }

    fn apply(
        &mut self,
        rule: &AclRule,
    ) -> Result<(), AclRuleError> {
        match rule {
            AclRule::On => self.enabled = true,
            AclRule::Off => self.enabled = false,
            AclRule::Password(pw) => {
                let hash = hash_password(pw);
                if !self.password_hashes.contains(&hash) {
                    self.password_hashes.push(hash);
                }
                self.nopass = false;
            }
            AclRule::RemovePassword(pw) => {
                let hash = hash_password(pw);
                let before = self.password_hashes.len();
                self.password_hashes.retain(|h| *h != hash);
                if before == self.password_hashes.len() {
                    return Err(AclRuleError {
                        rule: format!("<{pw}"),
                        reason: "no such password",
                    });
                }
            }
            AclRule::NoPass => {
                self.password_hashes.clear();
                self.nopass = true;
            }
            AclRule::ResetPass => {
                self.password_hashes.clear();
                self.nopass = false;
            }
            AclRule::AllowCategory(cat) => {
                let mask = category_mask(*cat);
                self.allowed_commands |= mask;
                self.clear_first_args(mask);
                if *cat == AclCategory::All {
                    self.all_commands = true;
                }
                self.command_rules.push(format!("+@{}", cat.name()));
            }
            AclRule::DenyCategory(cat) => {
                let mask = category_mask(*cat);
                self.allowed_commands &= !mask;
                self.clear_first_args(mask);
                // Категории команд вне таблицы неизвестны.
                self.all_commands = false;
                self.command_rules.push(format!("-@{}", cat.name()));
            }
            AclRule::AllowCommand(cmd) => {
                let bit = command_bit(cmd)?;
                self.allowed_commands |= bit;
                self.clear_first_args(bit);
                self.command_rules.push(format!("+{cmd}"));
            }
            AclRule::DenyCommand(cmd) => {
                let bit = command_bit(cmd)?;
                self.allowed_commands &= !bit;
                self.clear_first_args(bit);
                self.command_rules.push(format!("-{cmd}"));
            }
            AclRule::AllowFirstArg { command, arg } => {
                let (_, spec) = commands::lookup(command).ok_or_else(|| AclRuleError {
                    rule: format!("+{command}|{arg}"),
                    reason: "Unknown command or category name in ACL",
                })?;
                self.allowed_first_args
                    .entry(spec.index)
                    .or_default()
                    .insert(arg.to_ascii_lowercase());
                self.command_rules.push(format!("+{command}|{arg}"));
            }
            AclRule::KeyPattern(p) => self.raw_key_patterns.push(glob(p)?),
            AclRule::AllKeys => self.raw_key_patterns = vec![glob("*")?],
            AclRule::ResetKeys => self.raw_key_patterns.clear(),
            AclRule::ChannelPattern(p) => self.raw_channel_patterns.push(glob(p)?),
            AclRule::AllChannels => self.raw_channel_patterns = vec![glob("*")?],
            AclRule::ResetChannels => self.raw_channel_patterns.clear(),
        }
        Ok(())
    }

    fn clear_first_args(
        &mut self,
        mask: u128,
    ) {
        self.allowed_first_args
            .retain(|idx, _| mask & (1u128 << *idx) == 0);
    }

    /// Перестраивает скомпилированные наборы шаблонов.
    fn rebuild_patterns(&mut self) -> Result<(), AclRuleError> {
        self.key_patterns = build_set(&self.raw_key_patterns)?;
        self.channel_patterns = build_set(&self.raw_channel_patterns)?;
        Ok(())
    }

    /// Проверяет, может ли пользователь выполнить команду с аргументами.
    pub fn check_command(
        &self,
        command: &str,
        args: &[&str],
    ) -> bool {
        if !self.enabled {
            return false;
        }
        if commands::is_no_auth(command) {
            return true;
        }

        let Some((_, spec)) = commands::lookup(command) else {
            return self.all_commands;
        };

        if self.allowed_commands & spec.bit() != 0 {
            return true;
        }

        match (args.first(), self.allowed_first_args.get(&spec.index)) {
            (Some(first), Some(allowed)) => allowed.contains(&first.to_ascii_lowercase()),
            _ => false,
        }
    }

    /// Проверяет, разрешён ли доступ к ключу.
    pub fn check_key(
        &self,
        key: &str,
    ) -> bool {
        self.enabled && self.key_patterns.is_match(key)
    }

    /// Проверяет доступность Pub/Sub-канала.
    pub fn check_channel(
        &self,
        channel: &str,
    ) -> bool {
        self.enabled && self.channel_patterns.is_match(channel)
    }

    /// Проверяет пароль так же, как `AUTH`.
    pub fn verify_password(
        &self,
        password: &str,
    ) -> bool {
        if !self.enabled {
            return false;
        }
        self.nopass || self.password_hashes.contains(&hash_password(password))
    }

    /// Флаги пользователя в формате `ACL GETUSER`.
    pub fn flags(&self) -> Vec<String> {
        let mut flags = vec![if self.enabled { "on" } else { "off" }.to_string()];
        if self.nopass {
            flags.push("nopass".to_string());
        }
        flags
    }

    /// Описание командных правил в порядке применения.
    pub fn commands_description(&self) -> String {
        if self.command_rules.is_empty() {
            "-@all".to_string()
        } else {
            self.command_rules.join(" ")
        }
    }

    pub fn key_patterns(&self) -> Vec<String> {
        self.raw_key_patterns
            .iter()
            .map(|g| format!("~{}", g.glob()))
            .collect()
    }

    pub fn channel_patterns(&self) -> Vec<String> {
        self.raw_channel_patterns
            .iter()
            .map(|g| format!("&{}", g.glob()))
            .collect()
    }
}

impl FromStr for AclRule {
    type Err = AclRuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| AclRuleError {
            rule: s.to_string(),
            reason,
        };

        match s.to_ascii_lowercase().as_str() {
            "on" => return Ok(AclRule::On),
            "off" => return Ok(AclRule::Off),
            "nopass" => return Ok(AclRule::NoPass),
            "resetpass" => return Ok(AclRule::ResetPass),
            "allkeys" => return Ok(AclRule::AllKeys),
            "resetkeys" => return Ok(AclRule::ResetKeys),
            "allchannels" => return Ok(AclRule::AllChannels),
            "resetchannels" => return Ok(AclRule::ResetChannels),
            "allcommands" => return Ok(AclRule::AllowCategory(AclCategory::All)),
            "nocommands" => return Ok(AclRule::DenyCategory(AclCategory::All)),
            _ => {}
        }

        let first = s
            .chars()
            .next()
            .ok_or_else(|| invalid("Syntax error"))?;
        let rest = &s[first.len_utf8()..];

        match first {
            '>' => Ok(AclRule::Password(rest.to_string())),
            '<' => Ok(AclRule::RemovePassword(rest.to_string())),
            '~' if rest == "*" => Ok(AclRule::AllKeys),
            '~' => Ok(AclRule::KeyPattern(rest.to_string())),
            '&' if rest == "*" => Ok(AclRule::AllChannels),
            '&' => Ok(AclRule::ChannelPattern(rest.to_string())),
            '+' | '-' if rest.starts_with('@') => {
                let cat = AclCategory::from_name(&rest[1..])
                    .ok_or_else(|| invalid("Unknown command or category name in ACL"))?;
                if first == '+' {
                    Ok(AclRule::AllowCategory(cat))
                } else {
                    Ok(AclRule::DenyCategory(cat))
                }
            }
            '+' => match rest.split_once('|') {
                Some((cmd, arg)) if !arg.is_empty() => {
                    let (command, _) = commands::lookup(cmd)
                        .ok_or_else(|| invalid("Unknown command or category name in ACL"))?;
                    Ok(AclRule::AllowFirstArg {
                        command,
                        arg: arg.to_string(),
                    })
                }
                Some(_) => Err(invalid("Syntax error")),
                None => {
                    let (command, _) = commands::lookup(rest)
                        .ok_or_else(|| invalid("Unknown command or category name in ACL"))?;
                    Ok(AclRule::AllowCommand(command))
                }
            },
            '-' => {
                if rest.contains('|') {
                    return Err(invalid("Allowing first-arg of a subcommand is not supported"));
                }
                let (command, _) = commands::lookup(rest)
                    .ok_or_else(|| invalid("Unknown command or category name in ACL"))?;
                Ok(AclRule::DenyCommand(command))
            }
            _ => Err(invalid("Syntax error")),
        }
    }
}

/// Разбирает токены `ACL SETUSER` в правила.
pub fn parse_rules<S: AsRef<str>>(tokens: &[S]) -> Result<Vec<AclRule>, AclRuleError> {
    tokens.iter().map(|t| t.as_ref().parse()).collect()
}

/// SHA-256 пароля в hex, как его хранит Redis.
pub fn hash_password(password: &str) -> String {
    Sha256::digest(password.as_bytes())
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

fn command_bit(command: &str) -> Result<u128, AclRuleError> {
    commands::lookup(command)
        .map(|(_, spec)| spec.bit())
        .ok_or_else(|| AclRuleError {
            rule: command.to_string(),
            reason: "Unknown command or category name in ACL",
        })
}

fn glob(pattern: &str) -> Result<Glob, AclRuleError> {
    Glob::new(pattern).map_err(|_| AclRuleError {
        rule: pattern.to_string(),
        reason: "Syntax error",
    })
}

fn build_set(globs: &[Glob]) -> Result<GlobSet, AclRuleError> {
    let mut b = GlobSetBuilder::new();
    for g in globs {
        b.add(g.clone());
    }
    b.build().map_err(|_| AclRuleError {
        rule: "pattern".to_string(),
        reason: "Syntax error",
    })
}
