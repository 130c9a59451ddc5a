use bindery::binder::BeanModel;

#[derive(Clone, bindery::binder::BeanModel)]
struct Address {
    city: String,
}

#[derive(Clone, bindery::binder::BeanModel)]
struct DemoBean {
    email: String,
    #[bean(nested)]
    address: Address,
}

fn main() {
    let properties = DemoBean::property_set();
    assert!(properties.get("email").is_some());
    assert!(properties.get("address.city").is_some());
    assert_eq!(properties.len(), 2);
}
