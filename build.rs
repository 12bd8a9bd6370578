fn main() {
    // Emits the ESP-IDF sysenv cargo directives when building for espidf;
    // a no-op on host targets.
    embuild::espidf::sysenv::output();
}
