mod fallback;
mod tagged;
