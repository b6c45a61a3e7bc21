mod pool_id_churn;
mod spawn_queue_threads;
