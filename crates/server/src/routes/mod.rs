use actix_web::web;

pub mod analyze;
pub mod entries;
pub mod export;
pub mod health;
pub mod memory;
pub mod system;

/// Register every API route
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health::health)
        .service(analyze::analyze)
        .service(entries::list_entries)
        .service(entries::get_entry)
        .service(entries::update_entry)
        .service(entries::delete_entry)
        .service(memory::context)
        .service(memory::similar)
        .service(memory::clear_memory)
        .service(system::model_info)
        .service(system::metrics)
        .service(export::export);
}
