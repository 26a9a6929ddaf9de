pub mod comic;
pub mod paging;
