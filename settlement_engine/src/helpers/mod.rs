mod return_url;

pub use return_url::{parse_return_url, ReturnUrlHints};
