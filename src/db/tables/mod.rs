//! Database table operations

mod history_table;
mod playlist_table;
mod track_table;

pub use history_table::HistoryTable;
pub use playlist_table::PlaylistTable;
pub use track_table::TrackTable;
