// Type definitions: db entities, API objects, internal types
pub mod db;
pub mod dto;
pub mod internal;
