pub mod crawl;
pub mod db;
pub mod export;
pub mod parser;
