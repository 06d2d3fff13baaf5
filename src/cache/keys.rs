use std::time::Duration;

pub const CHARACTER_SET_LIST_TTL: Duration = Duration::from_secs(10 * 60);

pub fn character_set_list_key() -> &'static str {
    "character_sets:list"
}
