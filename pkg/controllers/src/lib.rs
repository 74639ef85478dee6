pub mod devpod;
pub mod podreplace;
