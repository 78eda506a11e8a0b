pub mod player_annotator;
