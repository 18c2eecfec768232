mod post_detail;
mod post_list;
mod service_list;

pub use post_detail::PostDetailView;
pub use post_list::PostListView;
pub use service_list::ServiceListView;
