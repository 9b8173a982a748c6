use crate::Activation;
use tch::{TchError, Tensor};

pub trait TensorActivationExt {
    fn f_activation(&self, act: Activation) -> Result<Tensor, TchError>;

    fn activation(&self, act: Activation) -> Tensor {
        self.f_activation(act).unwrap()
    }
}

impl TensorActivationExt for Tensor {
    fn f_activation(&self, act: Activation) -> Result<Tensor, TchError> {
        act.f_forward(self)
    }
}
