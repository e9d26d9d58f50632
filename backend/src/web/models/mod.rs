pub mod item_models;
