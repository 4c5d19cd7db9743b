pub mod overlay_evictor;
