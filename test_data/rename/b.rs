fn sum_all(values: &[u32]) -> u32 {
    let mut acc = 0;
    for value in values {
        acc += value;
    }
    acc
}

fn main() {
    let values = vec![1, 2, 3, 4];
    println!("total: {}", sum_all(&values));
}
