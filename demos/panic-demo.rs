fn main() {
    let _yeller = yeller::init(("demo-key", "development")).expect("could not create client");
    yeller::integrations::panic::register_panic_handler();

    let v: Vec<u32> = Vec::new();
    println!("{}", v[1]);
}
