use crate::Activation;
use tch::{nn, TchError, Tensor};

impl Activation {
    pub fn f_forward(&self, xs: &Tensor) -> Result<Tensor, TchError> {
        match self {
            Self::Linear => Ok(xs.shallow_clone()),
            Self::Relu => xs.f_relu(),
            Self::LeakyRelu => xs.f_leaky_relu(),
            Self::Elu => xs.f_elu(),
            Self::Logistic => xs.f_sigmoid(),
        }
    }
}

impl nn::Module for Activation {
    fn forward(&self, xs: &Tensor) -> Tensor {
        self.f_forward(xs).unwrap()
    }
}
