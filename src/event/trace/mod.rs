/// Notifies when the tracked index moves
pub mod index_price;
