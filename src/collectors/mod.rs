pub mod serverinfo;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub version: String,
    pub cpu_load: Vec<f64>,
    pub mem_total: u64,
    pub mem_free: u64,
    pub swap_total: u64,
    pub swap_free: u64,
    pub apps_installed: u64,
    pub apps_updates_available: u64,
    pub users: u64,
    pub files: u64,
    pub shares: u64,
    pub php_version: String,
    pub db_version: String,
    pub active_users_5m: u64,
    pub opcache_hit_rate: f64,
}
