// Publish/consume options are broccoli_queue's own; the backup queue needs no
// knobs beyond what it already offers.

pub type PublishConfig = broccoli_queue::queue::PublishOptions;
pub type ConsumeConfig = broccoli_queue::queue::ConsumeOptions;
pub type RetryStrategy = broccoli_queue::queue::RetryStrategy;
