pub mod contents;
pub mod parcels;
pub mod status;
