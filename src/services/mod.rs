pub mod character_sets;
pub mod encoding;
pub mod ingestion;
pub mod learned;
pub mod pinyin;
pub mod review;
