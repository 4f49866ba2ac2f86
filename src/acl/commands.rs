use super::directive::AclCategory;

bitflags::bitflags! {
    /// Битовая маска категорий команд (`@read`, `@write`, `@admin`, ...).
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct CmdCategory: u32 {
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const ADMIN = 1 << 2;
        const DANGEROUS = 1 << 3;
        const KEYSPACE = 1 << 4;
        const CONNECTION = 1 << 5;
        const PUBSUB = 1 << 6;
    }
}

/// Описание команды: индекс бита в маске пользователя и категории.
#[derive(Debug, Clone, Copy)]
pub struct CommandSpec {
    pub index: usize,
    categories: u32,
}

const R: u32 = CmdCategory::READ.bits();
const W: u32 = CmdCategory::WRITE.bits();
const A: u32 = CmdCategory::ADMIN.bits();
const D: u32 = CmdCategory::DANGEROUS.bits();
const K: u32 = CmdCategory::KEYSPACE.bits();
const C: u32 = CmdCategory::CONNECTION.bits();
const P: u32 = CmdCategory::PUBSUB.bits();

const fn spec(
    index: usize,
    categories: u32,
) -> CommandSpec {
    CommandSpec { index, categories }
}

/// Известные команды. Индекс должен быть уникален и меньше 128.
static COMMAND_TABLE: phf::Map<&'static str, CommandSpec> = phf::phf_map! {
    "get" => spec(0, R),
    "set" => spec(1, W),
    "del" => spec(2, W | K),
    "exists" => spec(3, R | K),
    "expire" => spec(4, W | K),
    "ttl" => spec(5, R | K),
    "keys" => spec(6, R | K | D),
    "scan" => spec(7, R | K),
    "incr" => spec(8, W),
    "mget" => spec(9, R),
    "mset" => spec(10, W),
    "hget" => spec(11, R),
    "hset" => spec(12, W),
    "hgetall" => spec(13, R),
    "lpush" => spec(14, W),
    "rpush" => spec(15, W),
    "lpop" => spec(16, W),
    "lrange" => spec(17, R),
    "sadd" => spec(18, W),
    "smembers" => spec(19, R),
    "zadd" => spec(20, W),
    "zrange" => spec(21, R),
    "publish" => spec(22, P),
    "subscribe" => spec(23, P),
    "psubscribe" => spec(24, P),
    "ping" => spec(25, C),
    "echo" => spec(26, C),
    "auth" => spec(27, C),
    "hello" => spec(28, C),
    "select" => spec(29, C),
    "client" => spec(30, A | D | C),
    "multi" => spec(31, 0),
    "exec" => spec(32, 0),
    "discard" => spec(33, 0),
    "watch" => spec(34, 0),
    "swapdb" => spec(35, K | W | D),
    "flushdb" => spec(36, K | W | D),
    "flushall" => spec(37, K | W | D),
    "info" => spec(38, D),
    "acl" => spec(39, A | D),
    "config" => spec(40, A | D),
    "module" => spec(41, A | D),
    "bgsave" => spec(42, A | D),
    "bgrewriteaof" => spec(43, A | D),
    "save" => spec(44, A | D),
    "shutdown" => spec(45, A | D),
    "debug" => spec(46, A | D),
    "monitor" => spec(47, A | D),
    "replicaof" => spec(48, A | D),
    "slaveof" => spec(49, A | D),
};

/// Команды, которые Redis разрешает до аутентификации вне зависимости от ACL.
const NO_AUTH_COMMANDS: [&str; 2] = ["auth", "hello"];

impl CommandSpec {
    pub fn bit(&self) -> u128 {
        1u128 << self.index
    }

    pub fn categories(&self) -> CmdCategory {
        CmdCategory::from_bits_truncate(self.categories)
    }
}

impl CmdCategory {
    /// Маска, соответствующая категории из директивы.
    pub fn from_acl(category: AclCategory) -> Self {
        match category {
            AclCategory::All => Self::all(),
            AclCategory::Admin => Self::ADMIN,
            AclCategory::Dangerous => Self::DANGEROUS,
            AclCategory::Read => Self::READ,
            AclCategory::Write => Self::WRITE,
            AclCategory::Keyspace => Self::KEYSPACE,
            AclCategory::Connection => Self::CONNECTION,
            AclCategory::Pubsub => Self::PUBSUB,
        }
    }
}

/// Ищет команду в таблице (регистр не важен).
pub fn lookup(command: &str) -> Option<(&'static str, CommandSpec)> {
    let lower = command.to_ascii_lowercase();
    COMMAND_TABLE
        .get_entry(lower.as_str())
        .map(|(name, spec)| (*name, *spec))
}

/// Маска всех команд, входящих в категорию. Для `@all` это все известные
/// команды, включая команды без категорий.
pub fn category_mask(category: AclCategory) -> u128 {
    let wanted = CmdCategory::from_acl(category);
    COMMAND_TABLE
        .values()
        .filter(|spec| category == AclCategory::All || spec.categories().intersects(wanted))
        .fold(0u128, |mask, spec| mask | spec.bit())
}

pub fn is_no_auth(command: &str) -> bool {
    NO_AUTH_COMMANDS
        .iter()
        .any(|c| c.eq_ignore_ascii_case(command))
}
