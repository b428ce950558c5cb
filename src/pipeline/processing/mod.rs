// Pipeline processing: raw rows into canonical records

pub mod normalize;
