mod fault_isolation;
mod spawn_timing;
