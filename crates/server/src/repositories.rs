mod subscription;

pub use subscription::SubscriptionStore;
