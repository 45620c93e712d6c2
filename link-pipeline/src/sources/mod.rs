pub mod link_list;
pub mod rss_feed;

pub use link_list::read_links_from_file;
pub use rss_feed::RssWatcher;
