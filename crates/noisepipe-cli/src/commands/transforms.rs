use noisepipe_core::known_transforms;

pub fn run() {
    println!("Registered transforms:\n");
    for info in known_transforms() {
        println!("  {:<10} {}", info.name, info.description);
        println!("  {:<10}   arity: {}, parameters: {}", "", info.arity, info.parameters);
    }
}
