/// A 2D buffer of texels, row-major from the top-left.
#[derive(Debug, Clone, PartialEq)]
pub struct Surface<T> {
    width: u32,
    height: u32,
    data: Vec<T>,
}

impl<T: Copy> Surface<T> {
    pub fn new(width: u32, height: u32, value: T) -> Self {
        Self {
            width,
            height,
            data: vec![value; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> T {
        self.data[self.index(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, value: T) {
        let i = self.index(x, y);
        self.data[i] = value;
    }

    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }

    pub fn texels(&self) -> &[T] {
        &self.data
    }

    /// `(x, y, value)` for every texel.
    pub fn enumerate(&self) -> impl Iterator<Item = (u32, u32, T)> + '_ {
        let width = self.width;
        self.data
            .iter()
            .enumerate()
            .map(move |(i, v)| (i as u32 % width, i as u32 / width, *v))
    }

    fn index(&self, x: u32, y: u32) -> usize {
        debug_assert!(x < self.width && y < self.height, "({x}, {y}) out of bounds");
        y as usize * self.width as usize + x as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_surface_get_set_and_enumerate() {
        let mut s = Surface::new(3, 2, 0u8);
        s.set(2, 1, 7);
        assert_eq!(s.get(2, 1), 7);
        assert_eq!(s.texels()[5], 7);
        let hits: Vec<_> = s.enumerate().filter(|(_, _, v)| *v == 7).collect();
        assert_eq!(hits, [(2, 1, 7)]);
        s.fill(1);
        assert!(s.texels().iter().all(|v| *v == 1));
    }
}
