fn total(values: &[u32]) -> u32 {
    let mut sum = 0;
    for value in values {
        sum += value;
    }
    sum
}

fn main() {
    let values = vec![1, 2, 3];
    println!("{}", total(&values));
}
