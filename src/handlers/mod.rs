pub mod rest;
pub mod ws;

pub use rest::{create_game_handler, get_game_handler, join_game_handler, list_games_handler};
pub use ws::websocket_handler;
