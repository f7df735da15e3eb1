mod forward;
mod reply;

pub use forward::{
    multipart_form, post_multipart, ForwardedForm, RawResponse, SendError, UpstreamClient,
};
pub use reply::{is_truthy, Reply};
