mod in_memory;
#[cfg(feature = "rabbitmq")]
mod rabbitmq;

pub use in_memory::InMemoryCopyQueue;
#[cfg(feature = "rabbitmq")]
pub use rabbitmq::RabbitMqCopyQueue;
