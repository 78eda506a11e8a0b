pub mod pipeline_logger;
pub mod track_players_use_case;
