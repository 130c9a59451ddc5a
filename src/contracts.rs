use std::sync::Arc;

pub type ValueChangeListener<V> = Arc<dyn Fn(&V) + Send + Sync>;

/// The minimal capability a UI input component must provide to participate in
/// data binding. The widget toolkit that implements it is out of scope here.
pub trait Field: Send + Sync + 'static {
    type Value: Clone + Send + Sync + 'static;

    fn value(&self) -> Self::Value;

    /// Pushes a new value into the field. Listeners registered through
    /// `add_value_change_listener` are invoked synchronously; a binding that
    /// loads a value marks the notification as suppressed on its own side, so
    /// implementations only need to deliver events in order.
    fn set_value(&self, value: Self::Value);

    fn add_value_change_listener(&self, listener: ValueChangeListener<Self::Value>);
}

/// Label-like sink for a single binding's error or helper message.
pub trait StatusTarget: Send + Sync + 'static {
    fn set_message(&self, message: &str);
    fn set_visible(&self, visible: bool);
}
